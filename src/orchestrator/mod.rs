//! 编排模块：阶段状态机、分析流水线与全局单例
pub mod global;
pub mod pipeline;
pub mod stage;

pub use self::global::{analyze, init_global_orchestrator};
pub use self::pipeline::Orchestrator;
pub use self::stage::{Stage, StageEvent};
