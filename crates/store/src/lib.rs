//! # 分析产物存储
//!
//! 以 JSON 文件形式持久化每次运行的 `AnalysisArtifact`，写入采用 "临时文件 + 重命名" 的原子替换。

pub mod artifact;
