//! Signal encoding for the buffer's uniform token stream.
//!
//! A producer emits three kinds of events: a value, a completion marker, or
//! an error. The buffer stores all three as one token type, [`Signal`], so
//! the backing queue and the terminal slot share a single element type and
//! the consumer can classify a token without decoding its payload.

use std::fmt;

/// Cause carried by an error signal.
///
/// Boxed so tokens stay one word per variant regardless of the concrete
/// error type the producer observed.
pub type Fault = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A single encoded event in the token stream.
///
/// Once a `Signal` has been placed in a queue backend or the terminal slot
/// it is never mutated; consumers take ownership on removal.
pub enum Signal<T> {
    /// An ordinary data item.
    Value(T),
    /// Terminal marker: the stream ended normally.
    Completed,
    /// Terminal marker: the stream ended with a failure.
    Error(Fault),
}

impl<T> Signal<T> {
    /// Encodes a data item.
    #[inline]
    pub fn value(payload: T) -> Self {
        Self::Value(payload)
    }

    /// Encodes the completion marker.
    #[inline]
    pub fn completed() -> Self {
        Self::Completed
    }

    /// Encodes a failure.
    #[inline]
    pub fn error(cause: impl Into<Fault>) -> Self {
        Self::Error(cause.into())
    }

    /// Returns `true` for a data token.
    #[inline]
    pub fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Returns `true` for the completion marker.
    #[inline]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns `true` for an error token.
    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Returns `true` for either terminal kind.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !self.is_value()
    }

    /// Decodes a data token, or `None` for terminals.
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Value(payload) => Some(payload),
            _ => None,
        }
    }

    /// Decodes an error token's cause, or `None` for the other kinds.
    pub fn into_error(self) -> Option<Fault> {
        match self {
            Self::Error(cause) => Some(cause),
            _ => None,
        }
    }

    /// Routes this token to the matching observer callback.
    ///
    /// Returns `true` if the token was terminal, which tells a dispatch
    /// loop to stop polling.
    pub fn dispatch<O: Observer<T> + ?Sized>(self, observer: &mut O) -> bool {
        match self {
            Self::Value(payload) => {
                observer.on_value(payload);
                false
            }
            Self::Completed => {
                observer.on_completed();
                true
            }
            Self::Error(cause) => {
                observer.on_error(cause);
                true
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(payload) => f.debug_tuple("Value").field(payload).finish(),
            Self::Completed => f.write_str("Completed"),
            Self::Error(cause) => f.debug_tuple("Error").field(cause).finish(),
        }
    }
}

/// Consumer capability receiving dispatched tokens.
///
/// The contract mirrors the stream it decodes: any number of `on_value`
/// calls, then at most one `on_completed` or `on_error`.
pub trait Observer<T> {
    /// Called once per data token, in poll order.
    fn on_value(&mut self, value: T);

    /// Called when the stream completed normally.
    fn on_completed(&mut self);

    /// Called when the stream ended with a failure.
    fn on_error(&mut self, cause: Fault);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        values: Vec<u64>,
        completed: bool,
        errors: Vec<String>,
    }

    impl Observer<u64> for Recorder {
        fn on_value(&mut self, value: u64) {
            self.values.push(value);
        }

        fn on_completed(&mut self) {
            self.completed = true;
        }

        fn on_error(&mut self, cause: Fault) {
            self.errors.push(cause.to_string());
        }
    }

    #[test]
    fn test_round_trip_value() {
        let signal = Signal::value(17u64);
        assert!(signal.is_value());
        assert!(!signal.is_terminal());
        assert_eq!(signal.into_value(), Some(17));
    }

    #[test]
    fn test_classification_is_exclusive() {
        let signals: Vec<Signal<u64>> = vec![
            Signal::value(1),
            Signal::completed(),
            Signal::error("boom"),
        ];
        for signal in &signals {
            let kinds = [signal.is_value(), signal.is_completed(), signal.is_error()];
            assert_eq!(kinds.iter().filter(|k| **k).count(), 1);
        }
    }

    #[test]
    fn test_dispatch_value_is_not_terminal() {
        let mut recorder = Recorder::default();
        assert!(!Signal::value(5u64).dispatch(&mut recorder));
        assert_eq!(recorder.values, vec![5]);
        assert!(!recorder.completed);
    }

    #[test]
    fn test_dispatch_terminals() {
        let mut recorder = Recorder::default();
        assert!(Signal::<u64>::completed().dispatch(&mut recorder));
        assert!(recorder.completed);

        let mut recorder = Recorder::default();
        assert!(Signal::<u64>::error("disk on fire").dispatch(&mut recorder));
        assert_eq!(recorder.errors, vec!["disk on fire"]);
    }

    #[test]
    fn test_into_error_only_for_errors() {
        assert!(Signal::<u64>::completed().into_error().is_none());
        assert!(Signal::value(3u64).into_error().is_none());
        let cause = Signal::<u64>::error("late").into_error().unwrap();
        assert_eq!(cause.to_string(), "late");
    }
}
