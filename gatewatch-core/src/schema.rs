use diesel::{allow_tables_to_appear_in_same_query, table};

table! {
    tracked_flights (id) {
        id -> Uuid,
        user_id -> Uuid,
        flight_number -> Text,
        airline_code -> Text,
        departure_date -> Date,
        departure_airport -> Text,
        arrival_airport -> Text,
        is_active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    flight_statuses (flight_key) {
        flight_key -> Text,
        flight_number -> Text,
        airline_code -> Text,
        status -> Text,
        gate -> Text,
        terminal -> Text,
        boarding_time -> Timestamptz,
        departure_time -> Timestamptz,
        arrival_time -> Timestamptz,
        delay_minutes -> Integer,
        gate_change -> Nullable<Jsonb>,
        last_updated -> Timestamptz,
        raw_data -> Nullable<Jsonb>,
    }
}

table! {
    users (id) {
        id -> Uuid,
        email -> Text,
        push_token -> Nullable<Text>,
        notify_gate_change -> Bool,
        notify_boarding -> Bool,
        notify_delay -> Bool,
        boarding_reminder_40 -> Bool,
        boarding_reminder_20 -> Bool,
        boarding_reminder_10 -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    airports (code) {
        code -> Text,
        name -> Text,
        city -> Text,
        country -> Text,
        timezone -> Text,
        security_wait_avg -> Integer,
        latitude -> Double,
        longitude -> Double,
    }
}

table! {
    notifications (id) {
        id -> Uuid,
        user_id -> Uuid,
        flight_key -> Text,
        category -> Text,
        title -> Text,
        body -> Text,
        priority -> Text,
        sent_at -> Timestamptz,
        read_at -> Nullable<Timestamptz>,
    }
}

allow_tables_to_appear_in_same_query!(
    tracked_flights,
    flight_statuses,
    users,
    airports,
    notifications,
);
