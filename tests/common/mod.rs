#![allow(dead_code)]

use camino::Utf8Path;
use validate_drp::constants::{construct_data_ids, CcdKey, DataId};
use validate_drp::repository::FileRepository;

pub const REPO_DIR: &str = "tests/data/repo";
pub const VISITS: [u32; 3] = [1, 2, 3];
pub const CCD: u32 = 10;

pub fn fixture_repo() -> FileRepository {
    FileRepository::open(Utf8Path::new(REPO_DIR)).unwrap()
}

pub fn fixture_data_ids() -> Vec<DataId> {
    construct_data_ids(&VISITS, &[CCD], CcdKey::Ccd)
}
