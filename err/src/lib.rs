#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device: {0}")]
    Device(DeviceError),
    #[error("FS: {0}")]
    Fs(FsError),
}

#[derive(thiserror::Error, Debug)]
pub enum DeviceError {
    #[error("Sector size {0} below supported minimum")]
    SectorSize(usize),
}

#[derive(thiserror::Error, Debug)]
pub enum FsError {
    #[error("Name is empty")]
    NameEmpty,
    #[error("Name of {0} bytes does not fit a header sector")]
    NameTooLong(usize),
    #[error("Payload of {0} bytes exceeds the 24-bit length field")]
    FileTooLarge(usize),
}

pub type Result<T> = core::result::Result<T, Error>;
