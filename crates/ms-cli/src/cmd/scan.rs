use crate::output::print_json;
use ms_core::relevance::ScanTarget;
use ms_core::report::render_markdown;
use ms_core::root::RootProvider;
use ms_core::scan::scan_planning_context;

pub fn run(
    provider: &dyn RootProvider,
    phase: &str,
    phase_name: &str,
    subsystems: &[String],
    keywords: &str,
    json: bool,
) -> anyhow::Result<()> {
    let target = ScanTarget::new(phase, phase_name, subsystems, keywords);
    let report = scan_planning_context(provider, target);

    if json {
        print_json(&report)?;
    } else {
        println!("{}", render_markdown(&report));
    }
    Ok(())
}
