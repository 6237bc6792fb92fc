//! 服务过滤器：决定某个资源是否由本实例加载。

use crate::labels::Labels;
use serde::{Deserialize, Serialize};

/// 服务过滤器配置。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceFilter {
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub match_all: bool,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub labels: Labels,
}

impl ServiceFilter {
    /// 未配置任何条件（或已禁用）时接受全部资源。
    pub fn is_configured(&self) -> bool {
        !self.disabled && !(self.types.is_empty() && self.ids.is_empty() && self.labels.is_empty())
    }

    /// 判断资源是否归属本实例。
    ///
    /// 默认任一已配置类别匹配即可；`match_all` 要求所有已配置类别均匹配。
    pub fn is_mine(&self, kind: &str, id: &str, labels: &Labels) -> bool {
        if !self.is_configured() {
            return true;
        }
        let mut checks = Vec::with_capacity(3);
        if !self.types.is_empty() {
            checks.push(self.types.iter().any(|item| item.eq_ignore_ascii_case(kind)));
        }
        if !self.ids.is_empty() {
            checks.push(self.ids.iter().any(|item| item == id));
        }
        if !self.labels.is_empty() {
            checks.push(
                self.labels
                    .iter()
                    .all(|(key, value)| labels.get(key) == Some(value)),
            );
        }
        if self.match_all {
            checks.iter().all(|matched| *matched)
        } else {
            checks.iter().any(|matched| *matched)
        }
    }
}
