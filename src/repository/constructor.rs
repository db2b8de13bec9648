use super::{Repository, RepositoryContext};
use crate::core::{Info, RudderResult};
use crate::di::RepositoryConstructor;
use async_trait::async_trait;
use std::sync::Arc;

/// Opens repositories against their remote catalogs
#[derive(Clone)]
pub struct CatalogConstructor {
    ctx: RepositoryContext,
}

impl CatalogConstructor {
    pub fn new(ctx: RepositoryContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &RepositoryContext {
        &self.ctx
    }
}

#[async_trait]
impl RepositoryConstructor for CatalogConstructor {
    async fn construct(&self, info: &Info) -> RudderResult<Arc<Repository>> {
        Ok(Arc::new(Repository::open(info.clone(), &self.ctx).await?))
    }
}
