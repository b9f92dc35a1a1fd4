use std::path::Path;

use ndarray::{Array, Array2, Array3, Dimension};
use ndarray_npy::{read_npy, write_npy, ReadNpyError, ReadableElement};

use crate::error::{Error, Result};
use crate::math::tensor::Tensor;

fn npy_error(path: &Path, e: impl std::fmt::Display) -> Error {
    Error::Npy { path: path.display().to_string(), message: e.to_string() }
}

fn read_as<T, D>(path: &Path) -> std::result::Result<Array<T, D>, ReadNpyError>
where
    T: ReadableElement,
    D: Dimension,
{
    read_npy(path)
}

/// Reads an `f64` array, accepting `f32` files as well.
fn read_f64<D: Dimension>(path: &Path) -> Result<Array<f64, D>> {
    match read_as::<f64, D>(path) {
        Ok(arr) => Ok(arr),
        Err(ReadNpyError::WrongDescriptor(_)) => read_as::<f32, D>(path)
            .map(|arr| arr.mapv(f64::from))
            .map_err(|e| npy_error(path, e)),
        Err(e) => Err(npy_error(path, e)),
    }
}

pub fn read_array2(path: &Path) -> Result<Array2<f64>> {
    read_f64(path)
}

pub fn read_array3(path: &Path) -> Result<Array3<f64>> {
    read_f64(path)
}

/// Reads an `H × W × C` field; a 2-D `H × W` file is read as one channel.
pub fn read_tensor(path: &Path) -> Result<Tensor> {
    match read_array3(path) {
        Ok(arr) => Ok(Tensor::from_array3(&arr)),
        Err(_) => {
            let arr = read_array2(path)?;
            let (h, w) = arr.dim();
            Ok(Tensor::from_data(h, w, 1, arr.iter().copied().collect()))
        }
    }
}

pub fn write_tensor(path: &Path, tensor: &Tensor) -> Result<()> {
    write_npy(path, &tensor.to_array3()?).map_err(|e| npy_error(path, e))
}

impl Tensor {
    pub fn from_array3(arr: &Array3<f64>) -> Tensor {
        let (h, w, c) = arr.dim();
        Tensor::from_data(h, w, c, arr.iter().copied().collect())
    }

    /// Copies the field into an `H × W × C` array. Fails if the buffer no
    /// longer matches the shape.
    pub fn to_array3(&self) -> Result<Array3<f64>> {
        Array3::from_shape_vec(self.shape(), self.data.clone())
            .map_err(|_| self.buffer_error())
    }

    pub(crate) fn buffer_error(&self) -> Error {
        Error::BufferLength {
            shape: self.shape(),
            expected: self.height * self.width * self.channels,
            actual: self.data.len(),
        }
    }
}
