use std::{fmt, future::Future};

use crate::domain::common::entities::app_errors::CoreError;

/// Ordered dish-identification strategies; the last one always succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DishStrategy {
    LlmSynthesis,
    CatalogMatch,
    TopConcept,
}

impl DishStrategy {
    pub const ORDER: [DishStrategy; 3] = [
        DishStrategy::LlmSynthesis,
        DishStrategy::CatalogMatch,
        DishStrategy::TopConcept,
    ];
}

impl fmt::Display for DishStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DishStrategy::LlmSynthesis => "dish synthesis",
            DishStrategy::CatalogMatch => "catalog match",
            DishStrategy::TopConcept => "top concept",
        })
    }
}

/// Ordered nutrition-resolution strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NutritionStrategy {
    DirectLookup,
    CompositeEstimate,
    ConceptLookups,
}

impl NutritionStrategy {
    pub const ORDER: [NutritionStrategy; 3] = [
        NutritionStrategy::DirectLookup,
        NutritionStrategy::CompositeEstimate,
        NutritionStrategy::ConceptLookups,
    ];
}

impl fmt::Display for NutritionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NutritionStrategy::DirectLookup => "direct nutrition lookup",
            NutritionStrategy::CompositeEstimate => "composite estimate",
            NutritionStrategy::ConceptLookups => "per-concept lookups",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyFailure<S> {
    pub strategy: S,
    pub error: CoreError,
}

impl<S: fmt::Display> StrategyFailure<S> {
    pub fn warning(&self) -> String {
        format!("{} failed: {}", self.strategy, self.error)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<S, T> {
    pub strategy: S,
    pub value: T,
    pub failures: Vec<StrategyFailure<S>>,
}

/// Runs `strategies` in order and stops at the first success. Every failure
/// before it is kept so the caller can surface it as a warning. A fatal
/// provider error ends the run early; later strategies would hit the same
/// rejected account.
pub async fn first_success<S, T, F, Fut>(
    strategies: &[S],
    mut run: F,
) -> Result<Resolved<S, T>, Vec<StrategyFailure<S>>>
where
    S: Copy,
    F: FnMut(S) -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    let mut failures = Vec::new();

    for &strategy in strategies {
        match run(strategy).await {
            Ok(value) => {
                return Ok(Resolved {
                    strategy,
                    value,
                    failures,
                });
            }
            Err(error) => {
                let fatal = error.is_fatal_provider_error();
                failures.push(StrategyFailure { strategy, error });
                if fatal {
                    break;
                }
            }
        }
    }

    Err(failures)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let mut calls = Vec::new();
        let resolved = first_success(&NutritionStrategy::ORDER, |strategy| {
            calls.push(strategy);
            async move {
                match strategy {
                    NutritionStrategy::DirectLookup => Err(CoreError::NoNutritionData),
                    _ => Ok(strategy),
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(resolved.strategy, NutritionStrategy::CompositeEstimate);
        assert_eq!(resolved.failures.len(), 1);
        assert_eq!(
            resolved.failures[0].warning(),
            "direct nutrition lookup failed: No nutrition data could be resolved for this image"
        );
        assert_eq!(
            calls,
            vec![
                NutritionStrategy::DirectLookup,
                NutritionStrategy::CompositeEstimate
            ]
        );
    }

    #[tokio::test]
    async fn test_first_success_collects_every_failure() {
        let failures = first_success(&DishStrategy::ORDER, |_| async {
            Err::<(), _>(CoreError::InternalServerError)
        })
        .await
        .unwrap_err();

        let order: Vec<_> = failures.iter().map(|f| f.strategy).collect();
        assert_eq!(order, DishStrategy::ORDER.to_vec());
    }

    #[tokio::test]
    async fn test_first_success_stops_at_fatal_provider_error() {
        let mut calls = Vec::new();
        let failures = first_success(&NutritionStrategy::ORDER, |strategy| {
            calls.push(strategy);
            async move {
                match strategy {
                    NutritionStrategy::DirectLookup => Err(CoreError::ProviderAuth {
                        provider: "USDA".to_string(),
                        message: "API_KEY_INVALID".to_string(),
                    }),
                    _ => Ok(strategy),
                }
            }
        })
        .await
        .unwrap_err();

        assert_eq!(calls, vec![NutritionStrategy::DirectLookup]);
        assert_eq!(failures.len(), 1);
        assert!(failures[0].error.is_fatal_provider_error());
    }
}
