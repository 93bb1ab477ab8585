use super::require_planning;
use crate::output::{print_group, print_json};
use ms_core::artifact::audit_subsystems;
use ms_core::root::RootProvider;

pub fn run(provider: &dyn RootProvider, values_only: bool, json: bool) -> anyhow::Result<()> {
    let planning = require_planning(provider)?;
    let audit = audit_subsystems(&planning);

    if json {
        return print_json(&audit);
    }

    for group in &audit.groups {
        let lines = group.entries.iter().map(|entry| {
            if values_only {
                entry.subsystem.clone()
            } else {
                format!("{}\t{}", entry.path, entry.subsystem)
            }
        });
        print_group(&group.header, lines)?;
    }
    if !audit.unknown.is_empty() {
        print_group("Not in config.json subsystems", &audit.unknown)?;
    }
    Ok(())
}
