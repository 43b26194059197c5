use rocket::Route;

mod admin;
mod cards;
mod decisions;
mod events;
mod subscriptions;
mod upstream;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(events::routes());
    routes.extend(admin::routes());
    routes.extend(decisions::routes());
    routes.extend(cards::routes());
    routes.extend(subscriptions::routes());
    routes.extend(upstream::routes());
    routes
}
