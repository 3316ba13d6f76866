//! Widget templates published as MCP resources.

use crate::mcp::protocol::{Resource, ResourceContents, WIDGET_MIME_TYPE};
use crate::mcp::server::{McpServer, ResourceHandler};
use crate::widgets::{WidgetKind, WidgetStore};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Serves `widget://<name>` from the widget store
pub struct WidgetResourceHandler {
    store: Arc<WidgetStore>,
}

impl WidgetResourceHandler {
    #[inline]
    pub fn new(store: Arc<WidgetStore>) -> Self {
        Self { store }
    }

    #[inline]
    pub fn resource(kind: WidgetKind) -> Resource {
        Resource {
            uri: kind.uri(),
            name: kind.name().to_string(),
            description: Some(kind.description().to_string()),
            mime_type: Some(WIDGET_MIME_TYPE.to_string()),
            meta: None,
        }
    }
}

#[async_trait]
impl ResourceHandler for WidgetResourceHandler {
    #[inline]
    async fn handle(&self, uri: &str) -> Result<ResourceContents> {
        let kind = WidgetKind::from_uri(uri).ok_or_else(|| anyhow!("Not a widget URI: {}", uri))?;
        let html = self.store.load(kind.name()).await;
        debug!("Serving widget {} ({} bytes)", kind.name(), html.len());

        Ok(ResourceContents {
            uri: uri.to_string(),
            mime_type: Some(WIDGET_MIME_TYPE.to_string()),
            text: html.to_string(),
            meta: None,
        })
    }
}

/// Register every widget template as a resource
#[inline]
pub async fn register_widgets(server: &McpServer, store: &Arc<WidgetStore>) -> Result<()> {
    for kind in WidgetKind::ALL {
        server
            .register_resource(
                WidgetResourceHandler::resource(kind),
                WidgetResourceHandler::new(Arc::clone(store)),
            )
            .await?;
    }
    Ok(())
}
