//! Intent routing: maps a free-text classification answer to a workflow
//! decision.
//!
//! The classifier is an LLM and its answer may wrap the category token in
//! surrounding words, so matching is substring containment over known tokens
//! in a fixed priority order. A malformed answer containing two tokens
//! silently resolves to the first in priority order; with a free-text
//! classifier that ambiguity cannot be parsed away.

use std::fmt;

/// Category assigned to an incoming query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    DirectData,
    AnalysisRequest,
    VisualizationRequest,
    Ambiguous,
    Unknown,
    Error,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DirectData => "DIRECT_DATA",
            Self::AnalysisRequest => "ANALYSIS_REQUEST",
            Self::VisualizationRequest => "VISUALIZATION_REQUEST",
            Self::Ambiguous => "AMBIGUOUS",
            Self::Unknown => "UNKNOWN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow path a query takes after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    QueryOnly,
    QueryThenAnalysis,
    QueryThenViz,
    UserClarification,
}

impl Route {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QueryOnly => "QUERY_ONLY",
            Self::QueryThenAnalysis => "QUERY_THEN_ANALYSIS",
            Self::QueryThenViz => "QUERY_THEN_VIZ",
            Self::UserClarification => "USER_CLARIFICATION",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-query workflow decision. Created fresh for every query and discarded
/// once the workflow proceeds; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingDecision {
    pub classification: Classification,
    pub route: Route,
    pub confirmation_needed: bool,
    /// Confirmation or clarification prompt shown to the user, when needed.
    pub confirmation_message: Option<String>,
    /// The original query text, carried through for traceability.
    pub user_query: String,
    /// Error text from a failed classification call, for logging only.
    pub error: Option<String>,
}

/// Resolves a free-text classification answer to a category token.
///
/// Substring containment, case-insensitive, first match in priority order
/// wins. Isolated here so the matching scheme can be replaced without
/// touching the routing state machine.
pub fn match_classification(text: &str) -> Classification {
    let upper = text.to_uppercase();
    if upper.contains("DIRECT_DATA") {
        Classification::DirectData
    } else if upper.contains("ANALYSIS_REQUEST") {
        Classification::AnalysisRequest
    } else if upper.contains("VISUALIZATION_REQUEST") {
        Classification::VisualizationRequest
    } else if upper.contains("AMBIGUOUS") {
        Classification::Ambiguous
    } else {
        Classification::Unknown
    }
}

/// Builds the routing decision for a classification answer.
pub fn decide(classification_text: &str, user_query: &str) -> RoutingDecision {
    match match_classification(classification_text) {
        Classification::DirectData => RoutingDecision {
            classification: Classification::DirectData,
            route: Route::QueryOnly,
            confirmation_needed: false,
            confirmation_message: None,
            user_query: user_query.to_string(),
            error: None,
        },
        Classification::AnalysisRequest => RoutingDecision {
            classification: Classification::AnalysisRequest,
            route: Route::QueryThenAnalysis,
            confirmation_needed: true,
            confirmation_message: Some(format!(
                "I'll analyze the data for: '{user_query}'. This will run queries and \
                 generate business insights. Continue?"
            )),
            user_query: user_query.to_string(),
            error: None,
        },
        Classification::VisualizationRequest => RoutingDecision {
            classification: Classification::VisualizationRequest,
            route: Route::QueryThenViz,
            confirmation_needed: true,
            confirmation_message: Some(format!(
                "I'll create visualizations for: '{user_query}'. This will generate \
                 charts and graphs. Continue?"
            )),
            user_query: user_query.to_string(),
            error: None,
        },
        Classification::Ambiguous => RoutingDecision {
            classification: Classification::Ambiguous,
            route: Route::UserClarification,
            confirmation_needed: true,
            confirmation_message: Some(format!(
                "I can help with '{user_query}' in several ways. Would you like me to: \
                 1) Show you the raw data, 2) Provide business insights and analysis, \
                 or 3) Create charts and visualizations?"
            )),
            user_query: user_query.to_string(),
            error: None,
        },
        _ => {
            tracing::warn!(
                answer = classification_text,
                "unrecognized classification, falling back to QUERY_ONLY"
            );
            RoutingDecision {
                classification: Classification::Unknown,
                route: Route::QueryOnly,
                confirmation_needed: false,
                confirmation_message: None,
                user_query: user_query.to_string(),
                error: None,
            }
        }
    }
}

/// Decision when the classification call itself failed. Same user-visible
/// behavior as an unknown answer, with the error carried for telemetry; the
/// failure never escapes the router.
pub fn decide_from_error(error: impl fmt::Display, user_query: &str) -> RoutingDecision {
    RoutingDecision {
        classification: Classification::Error,
        route: Route::QueryOnly,
        confirmation_needed: false,
        confirmation_message: None,
        user_query: user_query.to_string(),
        error: Some(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_data_routes_query_only_without_confirmation() {
        let d = decide("DIRECT_DATA", "count transactions");
        assert_eq!(d.classification, Classification::DirectData);
        assert_eq!(d.route, Route::QueryOnly);
        assert!(!d.confirmation_needed);
        assert_eq!(d.user_query, "count transactions");
        assert!(d.error.is_none());
    }

    #[test]
    fn token_embedded_in_surrounding_text_still_matches() {
        let d = decide("This looks like an ANALYSIS_REQUEST to me", "why did revenue dip");
        assert_eq!(d.classification, Classification::AnalysisRequest);
        assert_eq!(d.route, Route::QueryThenAnalysis);
        assert!(d.confirmation_needed);
        assert!(d
            .confirmation_message
            .unwrap()
            .contains("why did revenue dip"));
    }

    #[test]
    fn visualization_request_needs_confirmation() {
        let d = decide("VISUALIZATION_REQUEST", "chart revenue");
        assert_eq!(d.route, Route::QueryThenViz);
        assert!(d.confirmation_needed);
    }

    #[test]
    fn ambiguous_offers_three_options() {
        let d = decide("AMBIGUOUS", "tell me about our data");
        assert_eq!(d.route, Route::UserClarification);
        assert!(d.confirmation_needed);
        let msg = d.confirmation_message.unwrap();
        assert!(msg.contains("1)"));
        assert!(msg.contains("2)"));
        assert!(msg.contains("3)"));
    }

    #[test]
    fn unrecognized_answer_falls_back_to_query_only() {
        let d = decide("banana", "show revenue");
        assert_eq!(d.classification, Classification::Unknown);
        assert_eq!(d.route, Route::QueryOnly);
        assert!(!d.confirmation_needed);
    }

    #[test]
    fn classifier_failure_downgrades_instead_of_raising() {
        let d = decide_from_error("connection refused", "show revenue");
        assert_eq!(d.classification, Classification::Error);
        assert_eq!(d.route, Route::QueryOnly);
        assert!(!d.confirmation_needed);
        assert_eq!(d.error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn matching_is_case_insensitive_and_priority_ordered() {
        assert_eq!(match_classification("direct_data"), Classification::DirectData);
        // Malformed answer with two tokens resolves to the first in priority order.
        assert_eq!(
            match_classification("DIRECT_DATA or maybe ANALYSIS_REQUEST"),
            Classification::DirectData
        );
    }
}
