use taxi_demand::{TaxiDemand, TaxiDemandError, TransformError};
use std::env;

#[tokio::main]
async fn main() -> Result<(), TaxiDemandError> {
    configure_polars_display();
    let client = TaxiDemand::new().await?;

    let windows = client
        .features_and_target()
        .year(2022)
        .months(vec![1])
        .input_seq_len(24 * 7)
        .step_size(24)
        .call()
        .await?;

    let features = windows.features_frame().map_err(TransformError::from)?;
    let targets = windows.targets_series();

    println!("{:#?}", features);
    println!("{:#?}", targets);

    Ok(())
}

fn configure_polars_display() {
    // show every column
    env::set_var("POLARS_FMT_MAX_COLS", "-1");
    // show 20 rows
    env::set_var("POLARS_FMT_MAX_ROWS", "20");
}
