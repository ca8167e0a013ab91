//! Validated operation descriptors.

use serde::Serialize;

use crate::operation::error::OpError;
use crate::registry::peer::PeerParams;

/// What an operation does to its upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    List,
    Add,
    Remove,
    UpdateParam,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::List => "list",
            OpKind::Add => "add",
            OpKind::Remove => "remove",
            OpKind::UpdateParam => "update_param",
        }
    }

    pub fn is_mutation(&self) -> bool {
        !matches!(self, OpKind::List)
    }
}

/// Administrative availability toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Up,
    Down,
}

/// Fields explicitly requested by an operation. Unset fields are untouched
/// by an update and take their defaults on add.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParamSet {
    pub weight: Option<i32>,
    pub max_fails: Option<u32>,
    pub fail_timeout: Option<u32>,
    pub availability: Option<Availability>,
}

impl ParamSet {
    pub fn is_empty(&self) -> bool {
        self.weight.is_none()
            && self.max_fails.is_none()
            && self.fail_timeout.is_none()
            && self.availability.is_none()
    }

    pub fn weight(mut self, weight: i32) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn max_fails(mut self, max_fails: u32) -> Self {
        self.max_fails = Some(max_fails);
        self
    }

    pub fn fail_timeout(mut self, fail_timeout: u32) -> Self {
        self.fail_timeout = Some(fail_timeout);
        self
    }

    pub fn up(mut self) -> Self {
        self.availability = Some(Availability::Up);
        self
    }

    pub fn down(mut self) -> Self {
        self.availability = Some(Availability::Down);
        self
    }

    /// Overlay the requested fields on `base`.
    pub fn apply_to(&self, base: PeerParams) -> PeerParams {
        PeerParams {
            weight: self.weight.unwrap_or(base.weight),
            max_fails: self.max_fails.unwrap_or(base.max_fails),
            fail_timeout: self.fail_timeout.unwrap_or(base.fail_timeout),
            down: match self.availability {
                Some(Availability::Up) => false,
                Some(Availability::Down) => true,
                None => base.down,
            },
        }
    }

    fn validate(&self) -> Result<(), OpError> {
        if self.weight.is_some_and(|w| w <= 0) {
            return Err(OpError::invalid("weight must be positive"));
        }
        if self.max_fails == Some(0) {
            return Err(OpError::invalid("max_fails must be positive"));
        }
        if self.fail_timeout == Some(0) {
            return Err(OpError::invalid("fail_timeout must be positive"));
        }
        Ok(())
    }
}

/// One administrative intent against one upstream group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operation {
    kind: OpKind,
    upstream: String,
    server: Option<String>,
    params: ParamSet,
    verbose: bool,
}

impl Operation {
    pub fn list(upstream: impl Into<String>) -> Result<Self, OpError> {
        Self::new(OpKind::List, upstream.into(), None, ParamSet::default())
    }

    pub fn add(
        upstream: impl Into<String>,
        server: impl Into<String>,
        params: ParamSet,
    ) -> Result<Self, OpError> {
        Self::new(OpKind::Add, upstream.into(), Some(server.into()), params)
    }

    pub fn remove(upstream: impl Into<String>, server: impl Into<String>) -> Result<Self, OpError> {
        Self::new(
            OpKind::Remove,
            upstream.into(),
            Some(server.into()),
            ParamSet::default(),
        )
    }

    pub fn update(
        upstream: impl Into<String>,
        server: impl Into<String>,
        params: ParamSet,
    ) -> Result<Self, OpError> {
        Self::new(OpKind::UpdateParam, upstream.into(), Some(server.into()), params)
    }

    pub(crate) fn new(
        kind: OpKind,
        upstream: String,
        server: Option<String>,
        params: ParamSet,
    ) -> Result<Self, OpError> {
        if upstream.is_empty() {
            return Err(OpError::invalid("upstream is required"));
        }
        let server = server
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        if kind.is_mutation() && server.is_none() {
            return Err(OpError::invalid(format!(
                "server is required for {}",
                kind.as_str()
            )));
        }
        if kind == OpKind::UpdateParam && params.is_empty() {
            return Err(OpError::invalid("no parameters to update"));
        }
        params.validate()?;

        Ok(Self {
            kind,
            upstream,
            server,
            params,
            verbose: false,
        })
    }

    /// Request the detailed listing in the response.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn kind(&self) -> OpKind {
        self.kind
    }

    pub fn upstream(&self) -> &str {
        &self.upstream
    }

    /// Target server. Always present for mutating kinds.
    pub fn server(&self) -> &str {
        self.server.as_deref().unwrap_or_default()
    }

    pub fn params(&self) -> &ParamSet {
        &self.params
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }
}
