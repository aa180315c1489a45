use tracing::info;

use crate::api::routes::ApiState;
use crate::error::Result;
use crate::extract::{run_pipeline, CheckRequest};
use crate::oracle::OracleRequest;
use crate::types::StoredCheck;

/// One full check: extraction pipeline, then the oracle, then persistence.
/// Strictly sequential; the stored record needs the oracle's answer.
pub async fn run_price_check(state: &ApiState, req: &CheckRequest) -> Result<StoredCheck> {
    let record = run_pipeline(&state.fetcher, req).await?;

    let analysis = state
        .oracle
        .analyze(&OracleRequest::from_record(&record, &state.currency))
        .await;

    let check = state.store.create(&record, &analysis, &state.currency).await?;
    info!(
        event = "CHECK_STORED",
        id = %check.id,
        category = %check.category,
        source = %check.source,
        price = check.current_price,
        recommendation = %check.analysis.recommendation,
        "price check stored"
    );
    Ok(check)
}
