//! Native dlib backend (cargo feature `dlib`).
//!
//! Binds the `facerec` C wrapper around dlib's frontal face detector,
//! landmark predictor, and ResNet embedding network. The wrapper owns
//! every buffer it hands back: this module copies all numeric data into
//! owned [`RawFaces`] vectors and frees the foreign buffers before
//! returning, so nothing downstream can alias engine memory.
//!
//! Requires `libfacerec` (and its dlib/libjpeg dependencies) at link
//! time, and the two model files at init time.

use crate::engine::{Engine, EngineFault, RawFaces, RECT_STRIDE};
use crate::error::Error;
use crate::types::EMBEDDING_DIM;
use libc::{c_char, c_int, c_long, c_void};
use std::ffi::{CStr, CString};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::slice;

/// Landmark points reported per face by the C wrapper's 68-point shape
/// predictor.
const LANDMARK_POINTS: usize = 68;

#[repr(C)]
struct FacerecRaw {
    cls: *mut c_void,
    err_str: *mut c_char,
    err_code: c_int,
}

#[repr(C)]
struct FaceretRaw {
    num_faces: c_int,
    rectangles: *mut c_long,
    features: *mut c_long,
    descriptors: *mut f32,
    err_str: *mut c_char,
    err_code: c_int,
}

#[link(name = "facerec")]
extern "C" {
    fn facerec_init(model_dir: *const c_char) -> *mut FacerecRaw;
    fn facerec_recognize(
        rec: *mut FacerecRaw,
        img_data: *const u8,
        len: c_int,
        max_faces: c_int,
        jitter: c_int,
    ) -> *mut FaceretRaw;
    fn facerec_free(rec: *mut FacerecRaw);
}

/// Copy the fault out of a foreign `(err_str, err_code)` pair and free
/// the string.
///
/// # Safety
/// `err_str` must be a non-null, malloc-allocated C string; it is freed
/// here and must not be used afterwards.
unsafe fn take_fault(err_str: *mut c_char, err_code: c_int) -> EngineFault {
    let message = CStr::from_ptr(err_str).to_string_lossy().into_owned();
    libc::free(err_str as *mut c_void);
    EngineFault::new(err_code, message)
}

/// Handle to an initialized native dlib engine.
///
/// Released on drop. The native side serializes its non-reentrant stages
/// internally, so shared references may recognize concurrently.
pub struct DlibEngine {
    ptr: *mut FacerecRaw,
}

// The wrapped engine guards its detector, network, and sample state with
// its own mutexes; the pointer itself is only freed in Drop.
unsafe impl Send for DlibEngine {}
unsafe impl Sync for DlibEngine {}

impl DlibEngine {
    /// Initialize the engine from the model directory.
    pub fn init(model_dir: &Path) -> Result<Self, Error> {
        let c_dir = CString::new(model_dir.as_os_str().as_bytes())
            .map_err(|_| Error::Unknown("model directory path contains NUL".to_string()))?;

        let ptr = unsafe { facerec_init(c_dir.as_ptr()) };
        let (err_str, err_code) = unsafe { ((*ptr).err_str, (*ptr).err_code) };
        if !err_str.is_null() {
            let fault = unsafe { take_fault(err_str, err_code) };
            unsafe { facerec_free(ptr) };
            return Err(fault.into());
        }

        tracing::info!(model_dir = %model_dir.display(), "dlib engine initialized");
        Ok(Self { ptr })
    }
}

impl Engine for DlibEngine {
    fn recognize(
        &self,
        image_data: &[u8],
        max_faces: usize,
        jitter: u32,
    ) -> Result<RawFaces, EngineFault> {
        let ret = unsafe {
            facerec_recognize(
                self.ptr,
                image_data.as_ptr(),
                image_data.len() as c_int,
                max_faces as c_int,
                jitter as c_int,
            )
        };

        let result = unsafe { copy_out(&*ret) };
        unsafe { libc::free(ret as *mut c_void) };
        result
    }
}

impl Drop for DlibEngine {
    fn drop(&mut self) {
        unsafe { facerec_free(self.ptr) };
        tracing::info!("dlib engine released");
    }
}

/// Copy everything out of a foreign recognition result, freeing each
/// foreign buffer once copied. The caller frees `ret` itself.
///
/// # Safety
/// `ret` must point to a live `faceret` from `facerec_recognize`; its
/// buffers are freed here and must not be touched afterwards.
unsafe fn copy_out(ret: &FaceretRaw) -> Result<RawFaces, EngineFault> {
    if !ret.err_str.is_null() {
        return Err(take_fault(ret.err_str, ret.err_code));
    }

    let num_faces = ret.num_faces as usize;
    if num_faces == 0 {
        return Ok(RawFaces::empty());
    }

    let rectangles = slice::from_raw_parts(ret.rectangles, num_faces * RECT_STRIDE)
        .iter()
        .map(|&v| v as i64)
        .collect();
    let landmarks = slice::from_raw_parts(ret.features, num_faces * 2 * LANDMARK_POINTS)
        .iter()
        .map(|&v| v as i64)
        .collect();
    let embeddings = slice::from_raw_parts(ret.descriptors, num_faces * EMBEDDING_DIM).to_vec();

    libc::free(ret.rectangles as *mut c_void);
    libc::free(ret.features as *mut c_void);
    libc::free(ret.descriptors as *mut c_void);

    Ok(RawFaces {
        num_faces,
        rectangles,
        landmarks,
        embeddings,
    })
}
