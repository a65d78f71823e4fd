//! Fault taxonomy and the translation boundary
//!
//! A send attempt either produces a [`Response`] or a [`Fault`]. Before the
//! retry loop looks at it, the raw result goes through [`translate`]:
//!
//! - a [`Fault::Service`] means the server answered, so it becomes a (failed)
//!   response and is handled like any other response;
//! - a [`TransportError`], or an aggregate containing one, means the request
//!   never produced an answer and is offered to the retry policy;
//! - anything else is opaque and propagates unchanged.

use std::error::Error as StdError;
use std::fmt;
use std::io;

use thiserror::Error;

use crate::response::Response;

/// Boxed error used for faults the pipeline does not recognize
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// A failure in sending or receiving that prevented obtaining any response
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection could not be established
    #[error("failed to connect to {endpoint}: {message}")]
    Connect { endpoint: String, message: String },

    /// Name resolution failed
    #[error("failed to resolve {host}")]
    Dns { host: String },

    /// The connection was lost before a response arrived
    #[error("connection reset: {message}")]
    ConnectionReset { message: String },

    /// Underlying socket error
    #[error("transport IO error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// Create a connect error
    pub fn connect(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connect {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a DNS error
    pub fn dns(host: impl Into<String>) -> Self {
        Self::Dns { host: host.into() }
    }

    /// Create a connection reset error
    pub fn connection_reset(message: impl Into<String>) -> Self {
        Self::ConnectionReset {
            message: message.into(),
        }
    }
}

/// Anything a send attempt can fail with
#[derive(Debug, Error)]
pub enum Fault {
    /// The request never reached the server, or no answer came back
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with an error, reported by the transport as a fault
    #[error("service responded with status {}", .0.status())]
    Service(Response),

    /// Several faults reported together by a concurrent transport
    #[error(transparent)]
    Aggregate(#[from] AggregateFault),

    /// A fault the pipeline does not recognize
    #[error("{0}")]
    Other(BoxError),
}

impl Fault {
    /// Wrap an arbitrary error as an opaque fault
    pub fn other<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Other(error.into())
    }

    /// Whether this fault is, or contains, a transport fault
    pub fn contains_transport(&self) -> bool {
        match self {
            Fault::Transport(_) => true,
            Fault::Aggregate(aggregate) => aggregate.contains_transport(),
            Fault::Service(_) | Fault::Other(_) => false,
        }
    }

    /// Whether this fault is itself a transport fault
    pub fn is_transport(&self) -> bool {
        matches!(self, Fault::Transport(_))
    }

    /// Whether this fault is an aggregate
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Fault::Aggregate(_))
    }
}

/// A collection of faults reported as one
#[derive(Debug)]
pub struct AggregateFault {
    faults: Vec<Fault>,
}

impl AggregateFault {
    /// Combine several faults, kept in the order given
    pub fn new(faults: Vec<Fault>) -> Self {
        Self { faults }
    }

    /// The contained faults, in order
    pub fn faults(&self) -> &[Fault] {
        &self.faults
    }

    /// Number of directly contained faults
    pub fn len(&self) -> usize {
        self.faults.len()
    }

    /// Whether the aggregate holds no faults
    pub fn is_empty(&self) -> bool {
        self.faults.is_empty()
    }

    /// Whether any contained fault, at any depth, is a transport fault
    pub fn contains_transport(&self) -> bool {
        self.faults.iter().any(Fault::contains_transport)
    }

    /// Extract the first transport fault, searching nested aggregates
    ///
    /// Returns the aggregate untouched when it contains no transport fault.
    pub fn into_first_transport(self) -> Result<TransportError, Self> {
        let Some(index) = self.faults.iter().position(Fault::contains_transport) else {
            return Err(self);
        };

        let mut faults = self.faults;
        match faults.remove(index) {
            Fault::Transport(error) => Ok(error),
            Fault::Aggregate(inner) => inner.into_first_transport(),
            other => {
                faults.insert(index, other);
                Err(Self { faults })
            }
        }
    }
}

impl fmt::Display for AggregateFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} faults occurred", self.faults.len())?;
        for (i, fault) in self.faults.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{}", sep, fault)?;
        }
        Ok(())
    }
}

impl StdError for AggregateFault {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.faults.first().map(|fault| fault as &(dyn StdError + 'static))
    }
}

/// Result of classifying a fault
#[derive(Debug)]
pub enum FaultClass {
    /// A transport fault the retry policy gets to decide on
    Retryable(TransportError),
    /// Anything else, to be propagated as-is
    Opaque(Fault),
}

/// Classify a fault, flattening aggregates
///
/// An aggregate containing a transport fault is treated as if that fault
/// alone had occurred. An aggregate without one is returned unmodified.
pub fn classify(fault: Fault) -> FaultClass {
    match fault {
        Fault::Transport(error) => FaultClass::Retryable(error),
        Fault::Aggregate(aggregate) => match aggregate.into_first_transport() {
            Ok(error) => FaultClass::Retryable(error),
            Err(aggregate) => FaultClass::Opaque(Fault::Aggregate(aggregate)),
        },
        other => FaultClass::Opaque(other),
    }
}

/// What the retry loop sees after one attempt
#[derive(Debug)]
pub enum Outcome {
    /// The server answered, successfully or not
    Response(Response),
    /// No answer was obtained; the policy decides whether to retry
    Retryable(TransportError),
    /// Propagated to the caller unchanged
    Terminal(Fault),
}

/// Translate a raw send result into an [`Outcome`]
pub fn translate(result: Result<Response, Fault>) -> Outcome {
    match result {
        Ok(response) => Outcome::Response(response),
        Err(Fault::Service(response)) => Outcome::Response(response),
        Err(fault) => match classify(fault) {
            FaultClass::Retryable(error) => Outcome::Retryable(error),
            FaultClass::Opaque(fault) => Outcome::Terminal(fault),
        },
    }
}
