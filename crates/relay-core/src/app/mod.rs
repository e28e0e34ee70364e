//! App - アプリケーション層
//!
//! ports を組み合わせて receive / dispatch / acknowledge のサイクルを実装します。
//!
//! # 主要コンポーネント
//! - **HandlerRegistry**: routing key → handler の解決
//! - **Dispatcher**: 1 メッセージの処理と ack 登録
//! - **AckBuffer**: 削除トークンのバッチ化
//! - **PollLoop**: 空になるまで receive → dispatch → flush
//! - **RelayBuilder**: 設定からのワイヤリング

pub mod ack_buffer;
pub mod builder;
pub mod dispatcher;
pub mod poll_loop;
pub mod registry;

pub use self::ack_buffer::AckBuffer;
pub use self::builder::{BuildError, RelayBuilder};
pub use self::dispatcher::{Dispatch, Dispatcher};
pub use self::poll_loop::PollLoop;
pub use self::registry::{HandlerCatalog, HandlerRegistry, RegistryError, ResolvedHandler};
