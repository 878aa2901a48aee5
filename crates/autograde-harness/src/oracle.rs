use ndarray::{Array1, Array3, Array4};

use crate::submission::{Conv2dArgs, PoolArgs};
use crate::Fault;

/// Trusted computation that student output is judged against.
pub trait Oracle {
    fn conv2d(
        &self,
        input: &Array3<f32>,
        kernel: &Array4<f32>,
        bias: &Array1<f32>,
        args: &Conv2dArgs,
    ) -> Result<Array3<f32>, Fault>;

    fn avg_pool2d(&self, input: &Array3<f32>, args: &PoolArgs) -> Result<Array3<f32>, Fault>;
}

/// Direct-loop reference: zero-padded, strided, dilated, grouped
/// cross-correlation plus bias, and average pooling that counts padding.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceOracle;

fn reject(msg: impl Into<String>) -> Fault {
    Fault::Oracle(msg.into())
}

/// `floor((len + 2*pad - dilation*(k-1) - 1) / stride) + 1`, or `None` when
/// the window does not fit even once.
fn output_len(len: usize, k: usize, stride: usize, pad: usize, dilation: usize) -> Option<usize> {
    let padded = len + 2 * pad;
    let span = dilation * (k - 1) + 1;
    (padded >= span).then(|| (padded - span) / stride + 1)
}

impl Oracle for ReferenceOracle {
    fn conv2d(
        &self,
        input: &Array3<f32>,
        kernel: &Array4<f32>,
        bias: &Array1<f32>,
        args: &Conv2dArgs,
    ) -> Result<Array3<f32>, Fault> {
        let (c_in, h, w) = input.dim();
        let (c_out, cin_per_group, kh, kw) = kernel.dim();
        let (sh, sw) = args.stride.pair();
        let (ph, pw) = args.padding.pair();
        let (dh, dw) = args.dilation.pair();
        let groups = args.groups;

        if groups == 0 || sh == 0 || sw == 0 || dh == 0 || dw == 0 || kh == 0 || kw == 0 {
            return Err(reject("groups, stride, dilation and kernel size must be positive"));
        }
        if c_in % groups != 0 || c_out % groups != 0 {
            return Err(reject(format!(
                "channels ({c_in} in, {c_out} out) must be divisible by groups ({groups})"
            )));
        }
        if cin_per_group != c_in / groups {
            return Err(reject(format!(
                "kernel expects {cin_per_group} input channels per group, input provides {}",
                c_in / groups
            )));
        }
        if bias.len() != c_out {
            return Err(reject(format!("bias has {} entries, expected {c_out}", bias.len())));
        }

        let (Some(oh), Some(ow)) = (
            output_len(h, kh, sh, ph, dh),
            output_len(w, kw, sw, pw, dw),
        ) else {
            return Err(reject("kernel is larger than the padded input"));
        };

        let cout_per_group = c_out / groups;
        let mut out = Array3::<f32>::zeros((c_out, oh, ow));

        for co in 0..c_out {
            let group = co / cout_per_group;
            for i in 0..oh {
                for j in 0..ow {
                    let mut acc = bias[co];
                    for cg in 0..cin_per_group {
                        let ci = group * cin_per_group + cg;
                        for ki in 0..kh {
                            let Some(y) = (i * sh + ki * dh).checked_sub(ph).filter(|&y| y < h)
                            else {
                                continue;
                            };
                            for kj in 0..kw {
                                let Some(x) =
                                    (j * sw + kj * dw).checked_sub(pw).filter(|&x| x < w)
                                else {
                                    continue;
                                };
                                acc += input[[ci, y, x]] * kernel[[co, cg, ki, kj]];
                            }
                        }
                    }
                    out[[co, i, j]] = acc;
                }
            }
        }

        Ok(out)
    }

    fn avg_pool2d(&self, input: &Array3<f32>, args: &PoolArgs) -> Result<Array3<f32>, Fault> {
        let (c, h, w) = input.dim();
        let (kh, kw) = args.kernel_size.pair();
        let (sh, sw) = args.stride.pair();
        let (ph, pw) = args.padding.pair();

        if kh == 0 || kw == 0 || sh == 0 || sw == 0 {
            return Err(reject("kernel size and stride must be positive"));
        }
        if ph > kh / 2 || pw > kw / 2 {
            return Err(reject(format!(
                "pad should be at most half of kernel size, got padding ({ph}, {pw}) for kernel ({kh}, {kw})"
            )));
        }

        let (Some(oh), Some(ow)) = (output_len(h, kh, sh, ph, 1), output_len(w, kw, sw, pw, 1))
        else {
            return Err(reject("pool window is larger than the padded input"));
        };

        let divisor = (kh * kw) as f32;
        let mut out = Array3::<f32>::zeros((c, oh, ow));

        for ch in 0..c {
            for i in 0..oh {
                for j in 0..ow {
                    let mut sum = 0.0f32;
                    for ki in 0..kh {
                        let Some(y) = (i * sh + ki).checked_sub(ph).filter(|&y| y < h) else {
                            continue;
                        };
                        for kj in 0..kw {
                            let Some(x) = (j * sw + kj).checked_sub(pw).filter(|&x| x < w) else {
                                continue;
                            };
                            sum += input[[ch, y, x]];
                        }
                    }
                    out[[ch, i, j]] = sum / divisor;
                }
            }
        }

        Ok(out)
    }
}
