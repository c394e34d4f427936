//! Reading and writing data structures from and to disk.
//!
//! Every object is stored as a directory of flat files, one file per data vector,
//! containing the raw bytes of the vector elements.
//! Import the `Load` and `Store` traits for single vectors and the `Deconstruct` and `Reconstruct`
//! traits for composite structures like graphs and hierarchies.
//!
//! # Example
//!
//! ```no_run
//! # use route_engine::io::*;
//!
//! let base = Vec::<u32>::load_from("graph/base")?;
//! let distance = Vec::<f64>::load_from("graph/distance")?;
//! base.write_to(&"output/base")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{
    ffi::OsStr,
    fs::{metadata, File},
    io::{prelude::*, Error, ErrorKind, Result},
    mem,
    path::Path,
    slice,
};

/// Access the data of an object as a slice of bytes.
/// Do not use this trait directly but rather the `Store` trait.
pub trait DataBytes {
    fn data_bytes(&self) -> &[u8];
}

/// Mutable access to the data of a precreated object of the right size, so serialized bytes can be read into it.
/// Do not use this trait directly but rather the `Load` trait.
pub trait DataBytesMut {
    fn data_bytes_mut(&mut self) -> &mut [u8];
}

impl<T: Copy> DataBytes for [T] {
    fn data_bytes(&self) -> &[u8] {
        let num_bytes = self.len() * mem::size_of::<T>();
        unsafe { slice::from_raw_parts(self.as_ptr() as *const u8, num_bytes) }
    }
}

impl<T: Copy> DataBytes for Vec<T> {
    fn data_bytes(&self) -> &[u8] {
        self[..].data_bytes()
    }
}

impl<T: Copy> DataBytesMut for Vec<T> {
    fn data_bytes_mut(&mut self) -> &mut [u8] {
        let num_bytes = self.len() * mem::size_of::<T>();
        unsafe { slice::from_raw_parts_mut(self.as_mut_ptr() as *mut u8, num_bytes) }
    }
}

/// Write serialized objects to disk.
pub trait Store: DataBytes {
    fn write_to(&self, path: &dyn AsRef<Path>) -> Result<()> {
        File::create(path)?.write_all(self.data_bytes())
    }
}

impl<T: DataBytes> Store for T {}
impl<T> Store for [T] where [T]: DataBytes {}

/// Load serialized data back into objects.
pub trait Load: DataBytesMut + Sized {
    /// Create an object of the correct size for serialized data with the given number of bytes.
    fn new_with_bytes(num_bytes: usize) -> Result<Self>;

    fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let metadata = metadata(path.as_ref())?;
        let mut file = File::open(path)?;

        let mut object = Self::new_with_bytes(metadata.len() as usize)?;
        file.read_exact(object.data_bytes_mut())?;

        Ok(object)
    }
}

impl<T: Default + Copy> Load for Vec<T> {
    fn new_with_bytes(num_bytes: usize) -> Result<Self> {
        if num_bytes % mem::size_of::<T>() != 0 {
            return Err(invalid_data(format!(
                "file size {} is not a multiple of the element size {}",
                num_bytes,
                mem::size_of::<T>()
            )));
        }
        Ok(vec![T::default(); num_bytes / mem::size_of::<T>()])
    }
}

/// Build an `InvalidData` io error for files which could be read but do not make sense.
pub fn invalid_data(msg: String) -> Error {
    Error::new(ErrorKind::InvalidData, msg)
}

/// Serialize composite objects which need more than a single file.
pub trait Deconstruct: Sized {
    /// Call the `store_callback` for each file that should be written, with a file name and the data.
    fn store_each(&self, store_callback: &dyn Fn(&str, &dyn Store) -> Result<()>) -> Result<()>;

    /// Store this object into the given directory.
    fn deconstruct_to<D: AsRef<OsStr>>(&self, dir: &D) -> Result<()> {
        let path = Path::new(dir);
        self.store_each(&|name, object: &dyn Store| object.write_to(&path.join(name)))
    }
}

/// Passed to `Reconstruct::reconstruct_with` to load the individual files back.
#[derive(Debug)]
pub struct Loader<'a> {
    path: &'a Path,
}

impl<'a> Loader<'a> {
    /// Load the file which was stored under `name` in the `store_each` callback.
    pub fn load<T: Load, P: AsRef<Path>>(&self, name: P) -> Result<T> {
        T::load_from(self.path.join(name))
    }

    /// Like `load` but returns `None` when the file does not exist.
    pub fn load_optional<T: Load, P: AsRef<Path>>(&self, name: P) -> Result<Option<T>> {
        let path = self.path.join(name);
        if path.exists() {
            T::load_from(path).map(Some)
        } else {
            Ok(None)
        }
    }
}

/// Deserialize composite objects which need more than a single file.
pub trait Reconstruct: Sized {
    fn reconstruct_with(loader: Loader) -> Result<Self>;

    /// Reconstruct an object from the given directory.
    fn reconstruct_from<D: AsRef<OsStr>>(dir: &D) -> Result<Self> {
        let path = Path::new(dir);
        Self::reconstruct_with(Loader { path })
    }
}
