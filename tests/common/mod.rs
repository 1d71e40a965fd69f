use smart_order_router::{OrderRequest, RouteRequest, TargetInput};

pub fn route_request(order_id: &str, targets: &[(&str, i64, f64, i32)]) -> RouteRequest {
    RouteRequest {
        route_id: String::new(),
        order: OrderRequest {
            id: order_id.into(),
            symbol: "PETR4".into(),
            quantity: 100,
            side: "buy".into(),
        },
        targets: targets
            .iter()
            .map(|&(id, latency_ms, availability, priority)| TargetInput {
                id: id.into(),
                name: format!("venue {}", id),
                latency_ms,
                availability,
                priority,
            })
            .collect(),
    }
}
