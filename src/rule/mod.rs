//! 规则模块：技术签名定义与编译
pub mod builtin;
pub mod signature;

// 导出核心接口
pub use self::signature::{
    CompiledPattern, PatternDef, SignalSource, SignatureDef, SignatureTable, TechSignature,
};
