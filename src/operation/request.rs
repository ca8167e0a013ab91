//! Raw administrative requests, as received in query arguments.
//!
//! # Responsibilities
//! - Carry the query arguments untyped (`?upstream=web&add=&server=..`)
//! - Parse numbers, reject conflicting flags
//! - Produce a validated [`Operation`]
//!
//! # Design Decisions
//! - Flags are presence-based: `add`, `remove`, `up`, `down`, `verbose`
//!   count as set whatever their value
//! - Any parameter without add/remove means an update; parameters also
//!   turn on the verbose listing

use serde::{Deserialize, Serialize};

use crate::operation::descriptor::{OpKind, Operation, ParamSet};
use crate::operation::error::OpError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpRequest {
    pub upstream: Option<String>,
    pub server: Option<String>,
    pub verbose: Option<String>,
    pub add: Option<String>,
    pub remove: Option<String>,
    pub weight: Option<String>,
    pub max_fails: Option<String>,
    pub fail_timeout: Option<String>,
    pub up: Option<String>,
    pub down: Option<String>,
}

impl OpRequest {
    pub fn new(upstream: impl Into<String>) -> Self {
        Self {
            upstream: Some(upstream.into()),
            ..Self::default()
        }
    }

    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    pub fn flag_add(mut self) -> Self {
        self.add = Some(String::new());
        self
    }

    pub fn flag_remove(mut self) -> Self {
        self.remove = Some(String::new());
        self
    }

    pub fn flag_up(mut self) -> Self {
        self.up = Some(String::new());
        self
    }

    pub fn flag_down(mut self) -> Self {
        self.down = Some(String::new());
        self
    }

    pub fn flag_verbose(mut self) -> Self {
        self.verbose = Some(String::new());
        self
    }

    pub fn weight(mut self, weight: impl ToString) -> Self {
        self.weight = Some(weight.to_string());
        self
    }

    pub fn max_fails(mut self, max_fails: impl ToString) -> Self {
        self.max_fails = Some(max_fails.to_string());
        self
    }

    pub fn fail_timeout(mut self, fail_timeout: impl ToString) -> Self {
        self.fail_timeout = Some(fail_timeout.to_string());
        self
    }
}

impl TryFrom<&OpRequest> for Operation {
    type Error = OpError;

    fn try_from(request: &OpRequest) -> Result<Self, Self::Error> {
        if request.add.is_some() && request.remove.is_some() {
            return Err(OpError::invalid("add and remove at once are not allowed"));
        }
        if request.up.is_some() && request.down.is_some() {
            return Err(OpError::invalid("down and up at once are not allowed"));
        }

        let mut params = ParamSet {
            weight: parse_weight(request.weight.as_deref())?,
            max_fails: parse_positive("max_fails", request.max_fails.as_deref())?,
            fail_timeout: parse_positive("fail_timeout", request.fail_timeout.as_deref())?,
            availability: None,
        };
        if request.up.is_some() {
            params = params.up();
        }
        if request.down.is_some() {
            params = params.down();
        }

        let kind = if request.add.is_some() {
            OpKind::Add
        } else if request.remove.is_some() {
            OpKind::Remove
        } else if !params.is_empty() {
            OpKind::UpdateParam
        } else {
            OpKind::List
        };

        let verbose = request.verbose.is_some() || !params.is_empty();
        let upstream = request.upstream.clone().unwrap_or_default();
        let params = if kind == OpKind::Remove {
            ParamSet::default()
        } else {
            params
        };

        Operation::new(kind, upstream, request.server.clone(), params)
            .map(|op| op.with_verbose(verbose))
    }
}

fn parse_weight(value: Option<&str>) -> Result<Option<i32>, OpError> {
    parse_positive("weight", value)?
        .map(|w| {
            i32::try_from(w).map_err(|_| OpError::BadParameter {
                name: "weight",
                value: value.unwrap_or_default().to_string(),
            })
        })
        .transpose()
}

fn parse_positive(name: &'static str, value: Option<&str>) -> Result<Option<u32>, OpError> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(OpError::BadParameter {
            name,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::descriptor::Availability;

    #[test]
    fn test_list_by_default() {
        let op = Operation::try_from(&OpRequest::new("web")).unwrap();
        assert_eq!(op.kind(), OpKind::List);
        assert!(!op.verbose());
    }

    #[test]
    fn test_add_with_params() {
        let request = OpRequest::new("web")
            .server("127.0.0.1:6003")
            .flag_add()
            .weight(5)
            .fail_timeout(30);
        let op = Operation::try_from(&request).unwrap();

        assert_eq!(op.kind(), OpKind::Add);
        assert_eq!(op.server(), "127.0.0.1:6003");
        assert_eq!(op.params().weight, Some(5));
        assert_eq!(op.params().fail_timeout, Some(30));
        assert_eq!(op.params().max_fails, None);
        assert!(op.verbose());
    }

    #[test]
    fn test_params_without_add_is_update() {
        let request = OpRequest::new("web").server("127.0.0.1:6001").flag_down();
        let op = Operation::try_from(&request).unwrap();
        assert_eq!(op.kind(), OpKind::UpdateParam);
        assert_eq!(op.params().availability, Some(Availability::Down));
    }

    #[test]
    fn test_conflicting_flags() {
        let both = OpRequest::new("web").server("a:80").flag_add().flag_remove();
        assert!(matches!(
            Operation::try_from(&both),
            Err(OpError::InvalidDescriptor(_))
        ));

        let both = OpRequest::new("web").server("a:80").flag_up().flag_down();
        assert!(matches!(
            Operation::try_from(&both),
            Err(OpError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn test_bad_numbers() {
        for raw in ["abc", "-1", "0", "", "3000000000", "99999999999"] {
            let request = OpRequest::new("web").server("a:80").weight(raw);
            assert_eq!(
                Operation::try_from(&request),
                Err(OpError::BadParameter {
                    name: "weight",
                    value: raw.to_string()
                })
            );
        }
    }

    #[test]
    fn test_missing_fields() {
        let no_server = OpRequest::new("web").flag_remove();
        assert!(matches!(
            Operation::try_from(&no_server),
            Err(OpError::InvalidDescriptor(_))
        ));
        assert!(matches!(
            Operation::try_from(&OpRequest::default()),
            Err(OpError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn test_query_string_decoding() {
        let request: OpRequest =
            serde_json::from_value(serde_json::json!({"upstream": "web", "remove": "", "server": "a:80"}))
                .unwrap();
        let op = Operation::try_from(&request).unwrap();
        assert_eq!(op.kind(), OpKind::Remove);
    }
}
