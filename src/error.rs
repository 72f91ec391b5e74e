use snafu::Snafu;

/// Errors produced while configuring or running a [`crate::Digger`].
///
/// Every variant is surfaced to the caller; none are recovered internally,
/// and a run that fails this way discards whatever results it had
/// accumulated so far.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("minSupport must be in the range [0, 1], got {value}"))]
    SupportRange { value: f32 },

    #[snafu(display("minFocusSupport must be in the range [0, 1], got {value}"))]
    FocusSupportRange { value: f32 },

    #[snafu(display("minConditionalFocusSupport must be in the range [0, 1], got {value}"))]
    ConditionalFocusSupportRange { value: f32 },

    #[snafu(display("maxSupport must be in the range [0, 1], got {value}"))]
    MaxSupportRange { value: f32 },

    #[snafu(display("minLength ({min}) must not be greater than maxLength ({max})"))]
    LengthRange { min: usize, max: usize },

    #[snafu(display("disjoint[] has {got} entries but there are {expected} predicates"))]
    DisjointLength { got: usize, expected: usize },

    #[snafu(display("column \"{name}\" has length {got}, expected {expected}"))]
    ColumnLength {
        name: String,
        got: usize,
        expected: usize,
    },

    #[snafu(display(
        "column \"{name}\" contains a value outside of [0, 1]: {value} at row {row}"
    ))]
    MembershipOutOfRange { name: String, value: f32, row: usize },

    #[snafu(display(
        "cannot conjoin chains of differing length ({left} vs {right})"
    ))]
    IncompatibleChainLength { left: usize, right: usize },

    #[snafu(display("attempted to force a non-BOTH chain to FOCUS role"))]
    IllegalFocusCoercion,

    #[snafu(display("excluded subset refers to an unknown predicate id {id}"))]
    UnknownPredicateId { id: usize },

    #[snafu(display("callback returned an error: {message}"))]
    CallbackFailure { message: String },

    #[snafu(display("run was cancelled"))]
    Cancelled,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
