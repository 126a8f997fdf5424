pub mod claude;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

/// Rewritten ticket text returned by an AI service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Enhancement {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[async_trait]
pub trait Enhancer: Send + Sync {
    fn name(&self) -> &str;
    async fn enhance(&self, title: &str, description: Option<&str>) -> Result<Enhancement>;
}
