use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "NDS-OM API",
        version = "0.1.0",
        description = "Stored NDS-OM market watch observations for charting."
    ),
    paths(
        crate::routes::list_securities,
        crate::routes::security_rows,
        crate::routes::security_daily,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::SecurityListResponse,
        crate::dto::MarketRowResponse,
        crate::dto::MarketHistoryResponse,
        crate::dto::DailyTotalResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "market", description = "Stored market rows"),
        (name = "system", description = "Health and system status"),
    )
)]
pub struct ApiDoc;
