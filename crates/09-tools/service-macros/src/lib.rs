//! # Service Macros
//!
//! 为类服务生成 `Injectable` 实现的派生宏。
//!
//! ## 字段属性
//!
//! - `#[reference]` - 注入服务引用，字段类型为 `Reference<T>`
//! - `#[reference(qualifier = "name")]` - 注入带限定名的服务引用
//! - `#[context("key")]` - 注入上下文配置值，字段类型需实现 `FromStr`
//! - `#[context]` - 以字段名作为上下文配置键
//!
//! ## 结构体属性
//!
//! - `#[injectable(default_lifecycle)]` - 同时生成空的 `ServiceLifecycle` 实现
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use di_abstractions::Reference;
//! use service_macros::Injectable;
//!
//! #[derive(Default, Injectable)]
//! #[injectable(default_lifecycle)]
//! pub struct Calculator {
//!     #[reference]
//!     adder: Reference<dyn Adder>,
//!     #[context("calculator.precision")]
//!     precision: u32,
//! }
//! ```
//!
//! 生成的代码通过 `::di_abstractions` 路径引用接口，使用方需要依赖该 crate。

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod injectable;

/// 可注入服务派生宏
///
/// 依赖按字段声明顺序注入。结构体还需要实现 `Default`。
#[proc_macro_derive(Injectable, attributes(injectable, reference, context))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    injectable::derive_injectable_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
