#[rocket::launch]
fn rocket() -> _ {
    log::info!("starting archive server");
    archive_server::rocket()
}
