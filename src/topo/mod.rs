//! 拓扑构建
//!
//! 常用的小拓扑（Hub 星型、交换机星型）以及从场景 JSON 构建任意拓扑。

pub mod hub_star;
pub mod scenario;
pub mod switch_star;

pub use hub_star::{HubStar, HubStarOpts, build_hub_star, build_hub_star_with_backoff};
pub use scenario::{BuiltScenario, ScenarioError, build_scenario, load_scenario, parse_scenario};
pub use switch_star::{SwitchStar, SwitchStarOpts, build_switch_star};
