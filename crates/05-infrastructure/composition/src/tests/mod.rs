//! 组合层集成测试
