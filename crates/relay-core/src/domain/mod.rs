//! Domain model (messages, envelopes, errors, events, stats).
//!
//! ここは I/O を持たない純粋なデータとロジックだけを置きます。
//! バックエンドや handler との境界は `ports` にあります。

pub mod envelope;
pub mod errors;
pub mod events;
pub mod ids;
pub mod message;
pub mod stats;

pub use self::envelope::{Envelope, ParseFailure};
pub use self::errors::{
    DispatchContext, DispatchError, DispatchErrorKind, FactoryError, HandlerError,
};
pub use self::events::{AckFailure, RelayEvent};
pub use self::ids::RunId;
pub use self::message::{AckEntry, RawMessage};
pub use self::stats::RunStats;
