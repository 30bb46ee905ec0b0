use dpe_ml::pipeline::TrainingPipeline;
use dpe_ml_cli::{init_tracing, invocation};
use tracing::info;

fn main() -> anyhow::Result<()> {
    init_tracing();
    let (root, config) = invocation()?;
    info!(root = %root.display(), trials = config.n_trials, "starting training run");

    let report = TrainingPipeline::new(config).run(&root)?;
    println!("{}", report);
    Ok(())
}
