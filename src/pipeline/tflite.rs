use std::fmt::Debug;

use tflite::ops::builtin::BuiltinOpResolver;
use tflite::{FlatBufferModel, Interpreter, InterpreterBuilder};

use crate::pipeline::model::{GraphModel, InputTensor, ModelLoader, OutputTensor};
use crate::{Error, Result};

/// Builds TF Lite interpreters from flatbuffer model bytes.
#[derive(Debug, Clone)]
pub struct TfLiteLoader {
    num_threads: u32,
}

impl TfLiteLoader {
    pub fn new(num_threads: u32) -> Self {
        Self {
            num_threads: num_threads.max(1),
        }
    }
}

impl ModelLoader for TfLiteLoader {
    fn load(&self, bytes: Vec<u8>) -> Result<Box<dyn GraphModel>> {
        Ok(Box::new(TfLiteModel::from_buffer(bytes, self.num_threads)?))
    }
}

pub struct TfLiteModel {
    interpreter: Interpreter<'static, BuiltinOpResolver>,
    input_size: Option<(u32, u32)>,
}

fn model_error(err: impl Debug) -> Error {
    Error::Model(format!("{:?}", err))
}

fn inference_error(err: impl Debug) -> Error {
    Error::Inference(format!("{:?}", err))
}

impl TfLiteModel {
    pub fn from_buffer(bytes: Vec<u8>, num_threads: u32) -> Result<Self> {
        let model = FlatBufferModel::build_from_buffer(bytes).map_err(model_error)?;
        let resolver = BuiltinOpResolver::default();
        let builder = InterpreterBuilder::new(model, resolver).map_err(model_error)?;
        let mut interpreter = builder.build().map_err(model_error)?;
        interpreter.allocate_tensors().map_err(model_error)?;

        let inputs = interpreter.inputs().to_vec();
        if inputs.len() != 1 {
            return Err(Error::Model(format!(
                "expected a single input tensor, model has {}",
                inputs.len()
            )));
        }
        let tinfos = interpreter.get_input_details().map_err(model_error)?;
        // [1, height, width, channels]
        let input_size = tinfos
            .first()
            .filter(|info| info.dims.len() == 4)
            .map(|info| (info.dims[2] as u32, info.dims[1] as u32));

        interpreter.set_num_threads(num_threads as i32);
        tracing::debug!(
            ?input_size,
            outputs = interpreter.outputs().len(),
            num_threads,
            "built tflite interpreter"
        );

        Ok(Self {
            interpreter,
            input_size,
        })
    }

    fn write_input(&mut self, input: &InputTensor) -> Result<()> {
        let input_index = self.interpreter.inputs()[0];
        let quantized = self.interpreter.tensor_data::<u8>(input_index).is_ok();
        if quantized {
            let tensor = self
                .interpreter
                .tensor_data_mut::<u8>(input_index)
                .map_err(inference_error)?;
            if tensor.len() != input.data.len() {
                return Err(Error::Preprocess(format!(
                    "input tensor holds {} values, {}x{} image has {}",
                    tensor.len(),
                    input.width(),
                    input.height(),
                    input.data.len()
                )));
            }
            tensor.copy_from_slice(&input.data);
        } else {
            let tensor = self
                .interpreter
                .tensor_data_mut::<f32>(input_index)
                .map_err(inference_error)?;
            if tensor.len() != input.data.len() {
                return Err(Error::Preprocess(format!(
                    "input tensor holds {} values, {}x{} image has {}",
                    tensor.len(),
                    input.width(),
                    input.height(),
                    input.data.len()
                )));
            }
            for (dst, &src) in tensor.iter_mut().zip(&input.data) {
                *dst = src as f32;
            }
        }
        Ok(())
    }
}

impl GraphModel for TfLiteModel {
    fn execute(&mut self, input: &InputTensor) -> Result<Vec<OutputTensor>> {
        self.write_input(input)?;
        self.interpreter.invoke().map_err(inference_error)?;

        let outputs = self.interpreter.outputs().to_vec();
        let mut tensors = Vec::with_capacity(outputs.len());
        for index in outputs {
            let shape = self
                .interpreter
                .tensor_info(index)
                .map(|info| info.dims)
                .unwrap_or_default();
            let data: &[f32] = self.interpreter.tensor_data(index).map_err(inference_error)?;
            tracing::trace!(index, ?shape, "output tensor");
            tensors.push(OutputTensor::new(shape, data.to_vec()));
        }
        Ok(tensors)
    }

    fn input_size(&self) -> Option<(u32, u32)> {
        self.input_size
    }
}
