/// Classification for retry policy.
///
/// Used by the retrying fetcher to decide whether a failed attempt is
/// worth repeating.
///
/// # Behavior Summary
///
/// | Class | Retried? | Consumes a rate token on retry? |
/// |-------|----------|---------------------------------|
/// | `Retry` | Yes, up to the configured limit | Yes |
/// | `Never` | No | - |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Transient failure: connection problems, timeouts or an upstream 5xx.
    /// The attempt is repeated with a fresh rate-limit acquisition until
    /// the retry budget runs out.
    Retry,

    /// Terminal failure: malformed request, 4xx, undecodable body,
    /// cancellation or shutdown. Repeating the call cannot help.
    Never,
}
