//! 开盒网格游戏（客户端状态机）
//!
//! 网格只是装饰：真正的奖品由 [`PrizeResolver`] 在服务端抽取，两者是独立的随机过程。

pub mod grid;
pub mod resolver;

pub use grid::*;
pub use resolver::*;
