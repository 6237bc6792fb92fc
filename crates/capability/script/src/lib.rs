//! 脚本执行契约、模板渲染与变量加载。

mod engine;
mod error;
mod template;
mod variables;

pub use engine::{PassthroughEngine, ScriptEngine};
pub use error::ScriptError;
pub use template::{lookup_path, render, render_map, value_to_text};
pub use variables::{FIELD_PREFIX, NODE_PREFIX, load_variables};
