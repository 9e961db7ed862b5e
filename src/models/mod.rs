//! 核心数据模型模块
//!
//! 定义人设、会话状态、评分结果和通话转写。

pub mod persona;
pub mod score;
pub mod session;
pub mod transcript;

pub use persona::*;
pub use score::*;
pub use session::*;
pub use transcript::*;
