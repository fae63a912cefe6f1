//! Environment overrides: `SHIFT_AUTOMATOR__<SECTION>__<KEY>`.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

use crate::config::ENV_PREFIX;

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("processing.shifts"),
    )
}
