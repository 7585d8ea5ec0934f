//! 运行时：启动准备、关闭流程和运行模式

pub mod lifetime;
pub mod modes;
