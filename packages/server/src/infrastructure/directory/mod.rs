//! 外部コラボレーターのインメモリ実装
//!
//! - `InMemoryParticipantDirectory`: JSON ファイルから読み込む参加者ディレクトリ
//! - `InMemoryPollArchive`: 作成されたポーリングを記録するアーカイブ

pub mod inmemory;

pub use inmemory::{InMemoryParticipantDirectory, InMemoryPollArchive};
