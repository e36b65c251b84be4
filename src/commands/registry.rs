use super::{
    ChangePasswordHandler, CommandHandler, DeleteAddressHandler, InsertBannerHandler,
    InsertTagHandler, RecordJustificationHandler, RegisterAccountHandler,
};
use crate::config::BusinessConfig;
use crate::models::CommandKind;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Lookup from command kind to the handler that executes it
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<CommandKind, Arc<dyn CommandHandler>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a handler for every built-in command kind
    pub fn with_defaults(business: &BusinessConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(RegisterAccountHandler::new(business.clone())));
        registry.register(Arc::new(InsertBannerHandler::new(business.clone())));
        registry.register(Arc::new(InsertTagHandler));
        registry.register(Arc::new(ChangePasswordHandler::new(business.clone())));
        registry.register(Arc::new(DeleteAddressHandler));
        registry.register(Arc::new(RecordJustificationHandler));
        registry
    }

    /// Register `handler` for its kind, returning the handler it replaced
    pub fn register(&mut self, handler: Arc<dyn CommandHandler>) -> Option<Arc<dyn CommandHandler>> {
        let kind = handler.kind();
        debug!(kind = %kind, "Command handler registered");
        self.handlers.insert(kind, handler)
    }

    pub fn get(&self, kind: CommandKind) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(&kind).cloned()
    }

    pub fn kinds(&self) -> Vec<CommandKind> {
        let mut kinds: Vec<_> = self.handlers.keys().copied().collect();
        kinds.sort_by_key(|kind| kind.to_string());
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_every_kind() {
        let registry = HandlerRegistry::with_defaults(&BusinessConfig::default());
        for kind in CommandKind::ALL {
            assert_eq!(registry.get(kind).map(|h| h.kind()), Some(kind));
        }
        assert_eq!(registry.kinds().len(), CommandKind::ALL.len());
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut registry = HandlerRegistry::new();
        assert!(registry.register(Arc::new(InsertTagHandler)).is_none());
        assert!(registry.register(Arc::new(InsertTagHandler)).is_some());
        assert!(registry.get(CommandKind::DeleteAddress).is_none());
    }
}
