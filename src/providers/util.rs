use tracing::debug;

use crate::core::rate::SourceUnavailable;

/// Performs the single outbound GET a source is allowed per fetch and returns
/// the response body. Transport errors and non-2xx statuses are mapped to
/// [`SourceUnavailable`] for the given source code.
pub(crate) async fn get_body(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, &str)],
    code: &str,
) -> Result<String, SourceUnavailable> {
    debug!(source = %code, "Requesting rates from {}", url);

    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| SourceUnavailable::new(code, format!("Unable to get source data: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceUnavailable::new(
            code,
            format!("Invalid response code ({status})"),
        ));
    }

    let body = response.text().await.map_err(|e| {
        SourceUnavailable::new(code, format!("Unable to read source response body: {e}"))
    })?;
    debug!(source = %code, "Source response: {}", body);

    Ok(body)
}
