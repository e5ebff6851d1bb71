// Diesel table definitions for the audit ledger.

diesel::table! {
    opportunities (id) {
        id -> Nullable<Integer>,
        market_id -> Text,
        timestamp -> Text,
        yes_ask -> Nullable<Text>,
        no_ask -> Nullable<Text>,
        yes_size -> Nullable<Text>,
        no_size -> Nullable<Text>,
        sum_cost -> Nullable<Text>,
        edge -> Nullable<Text>,
        cost_buffer -> Text,
        decision -> Text,
        reason -> Text,
        created_at -> Text,
    }
}

diesel::table! {
    tradesets (id) {
        id -> Nullable<Integer>,
        market_id -> Text,
        status -> Text,
        yes_order_id -> Nullable<Text>,
        no_order_id -> Nullable<Text>,
        yes_cost -> Nullable<Text>,
        no_cost -> Nullable<Text>,
        total_cost -> Nullable<Text>,
        total_fees -> Nullable<Text>,
        expected_payout -> Nullable<Text>,
        realized_pnl -> Nullable<Text>,
        resolution_outcome -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Nullable<Text>,
    }
}

diesel::table! {
    orders (id) {
        id -> Nullable<Integer>,
        order_id -> Text,
        tradeset_id -> Nullable<Integer>,
        market_id -> Text,
        token_id -> Text,
        side -> Text,
        order_type -> Text,
        price -> Text,
        size -> Text,
        status -> Text,
        filled_size -> Text,
        avg_fill_price -> Nullable<Text>,
        fee -> Text,
        created_at -> Text,
        updated_at -> Nullable<Text>,
    }
}

diesel::table! {
    fills (id) {
        id -> Nullable<Integer>,
        fill_id -> Text,
        order_id -> Text,
        price -> Text,
        size -> Text,
        fee -> Text,
        timestamp -> Text,
        created_at -> Text,
    }
}

diesel::table! {
    risk_events (id) {
        id -> Nullable<Integer>,
        event_type -> Text,
        market_id -> Nullable<Text>,
        details -> Nullable<Text>,
        created_at -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(opportunities, tradesets, orders, fills, risk_events,);
