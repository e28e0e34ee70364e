//! Domain identifiers (strongly-typed IDs).
//!
//! relay が自分で採番する ID は「1 回の drain 実行」を表す `RunId` だけです。
//! キューのメッセージ ID はバックエンドが採番するので、ここでは扱いません。
//!
//! ## ULID を使う理由
//! - 時刻でソートできるので、ログを run 単位で並べやすい
//! - 複数プロセスで調整なしに生成できる
//!
//! `Id<T>` は Phantom type でマーカーを持つ汎用型です。
//! 将来 ID の種類が増えても Display/serde の実装を共有できます。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"run-" など）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Run のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Run {}

impl IdMarker for Run {
    fn prefix() -> &'static str {
        "run-"
    }
}

/// Identifier of one poll-loop invocation (receive until the queue is empty).
pub type RunId = Id<Run>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_displays_with_prefix() {
        let ulid = Ulid::new();
        let run_id = RunId::from_ulid(ulid);

        assert_eq!(run_id.as_ulid(), ulid);
        assert_eq!(run_id.to_string(), format!("run-{ulid}"));
    }

    #[test]
    fn run_ids_are_sortable() {
        let id1 = RunId::from_ulid(Ulid::new());
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = RunId::from_ulid(Ulid::new());

        assert!(id1 < id2);
    }

    #[test]
    fn run_id_serializes_as_bare_ulid() {
        let run_id = RunId::from_ulid(Ulid::new());

        let serialized = serde_json::to_string(&run_id).unwrap();
        let deserialized: RunId = serde_json::from_str(&serialized).unwrap();

        assert_eq!(run_id, deserialized);
        // PhantomData はメモリを消費しない
        assert_eq!(std::mem::size_of::<RunId>(), std::mem::size_of::<Ulid>());
    }
}
