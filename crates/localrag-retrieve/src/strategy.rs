use std::fmt;
use std::str::FromStr;

use localrag_core::error::{Error, Result};
use localrag_core::types::RetrievalResult;

use crate::hyde::HydeRetriever;
use crate::retriever::Retriever;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Direct,
    Hyde,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Direct => "direct",
            StrategyKind::Hyde => "hyde",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(StrategyKind::Direct),
            "hyde" => Ok(StrategyKind::Hyde),
            other => Err(Error::InvalidConfig(format!("unknown retrieval strategy '{other}'"))),
        }
    }
}

/// Outcome of one retrieval. `hypothetical_document` is set only by HyDE.
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub result: RetrievalResult,
    pub hypothetical_document: Option<String>,
}

/// Retrieval approach chosen once when the pipeline is assembled.
pub enum RetrievalStrategy {
    Direct(Retriever),
    Hyde(HydeRetriever),
}

impl RetrievalStrategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            RetrievalStrategy::Direct(_) => StrategyKind::Direct,
            RetrievalStrategy::Hyde(_) => StrategyKind::Hyde,
        }
    }

    pub fn retrieve(&self, query: &str, k: usize) -> Result<Retrieval> {
        match self {
            RetrievalStrategy::Direct(r) => Ok(Retrieval { result: r.retrieve(query, k)?, hypothetical_document: None }),
            RetrievalStrategy::Hyde(h) => {
                let (result, doc) = h.retrieve(query, k)?;
                Ok(Retrieval { result, hypothetical_document: Some(doc) })
            }
        }
    }
}

impl From<Retriever> for RetrievalStrategy {
    fn from(r: Retriever) -> Self { RetrievalStrategy::Direct(r) }
}

impl From<HydeRetriever> for RetrievalStrategy {
    fn from(h: HydeRetriever) -> Self { RetrievalStrategy::Hyde(h) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_kinds_case_insensitively() {
        assert_eq!("direct".parse::<StrategyKind>().unwrap(), StrategyKind::Direct);
        assert_eq!(" HyDE ".parse::<StrategyKind>().unwrap(), StrategyKind::Hyde);
    }

    #[test]
    fn unknown_kind_is_config_error() {
        assert!(matches!("bm25".parse::<StrategyKind>(), Err(Error::InvalidConfig(_))));
    }
}
