use dpe_ml::pipeline::DatasetPreparer;
use dpe_ml_cli::{init_tracing, invocation};

fn main() -> anyhow::Result<()> {
    init_tracing();
    let (root, config) = invocation()?;
    let out = config.processed_path(&root);

    let prepared = DatasetPreparer::new(config).run(&root)?;
    let bundle = &prepared.bundle;
    println!(
        "Prepared {} training and {} test rows with {} features ({} label-encoded columns).",
        bundle.y_train.len(),
        bundle.y_test.len(),
        bundle.x_train.n_cols(),
        prepared.encoders.len()
    );
    println!("Feature bundle saved to {}", out.display());
    Ok(())
}
