use serde::Serialize;

#[derive(Serialize, Debug)]
pub struct Status {
    pub status: &'static str,
}
