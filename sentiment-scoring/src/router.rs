//! Model routing by source type

use common::{ModelFamily, SourceKind};

/// Which family scores a source first, and who is consulted on escalation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub primary: ModelFamily,
    pub escalation: Vec<ModelFamily>,
}

/// Static source-to-model routing table
#[derive(Debug, Clone, Copy)]
pub struct ModelRouter {
    secondary_enabled: bool,
}

impl ModelRouter {
    pub fn new(secondary_enabled: bool) -> Self {
        Self { secondary_enabled }
    }

    /// Short informal text goes to the lexical model, formal news to the transformer.
    ///
    /// The match is exhaustive, so a new source kind cannot be added
    /// without deciding where it routes.
    pub fn route(&self, source: SourceKind) -> Route {
        let (primary, mut escalation) = match source {
            SourceKind::Social | SourceKind::Forum | SourceKind::Comment => {
                (ModelFamily::Lexical, vec![ModelFamily::Transformer])
            }
            SourceKind::FormalNews => (ModelFamily::Transformer, vec![ModelFamily::Lexical]),
        };

        if self.secondary_enabled {
            escalation.push(ModelFamily::SecondaryVoter);
        }

        Route { primary, escalation }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_by_source() {
        let router = ModelRouter::new(true);

        for source in [SourceKind::Social, SourceKind::Forum, SourceKind::Comment] {
            let route = router.route(source);
            assert_eq!(route.primary, ModelFamily::Lexical);
            assert_eq!(
                route.escalation,
                vec![ModelFamily::Transformer, ModelFamily::SecondaryVoter]
            );
        }

        let route = router.route(SourceKind::FormalNews);
        assert_eq!(route.primary, ModelFamily::Transformer);
        assert_eq!(route.escalation, vec![ModelFamily::Lexical, ModelFamily::SecondaryVoter]);
    }

    #[test]
    fn test_secondary_disabled() {
        let router = ModelRouter::new(false);
        for source in SourceKind::ALL {
            let route = router.route(source);
            assert!(!route.escalation.contains(&ModelFamily::SecondaryVoter));
            assert!(!route.escalation.contains(&route.primary));
            assert_eq!(route.escalation.len(), 1);
        }
    }
}
