//Copyright 2024 Felix Engl
//
//Licensed under the Apache License, Version 2.0 (the "License");
//you may not use this file except in compliance with the License.
//You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
//Unless required by applicable law or agreed to in writing, software
//distributed under the License is distributed on an "AS IS" BASIS,
//WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//See the License for the specific language governing permissions and
//limitations under the License.

/// A trait that allows to check, if a number is in the normal spectrum or any
pub trait IsNormalNumber: Copy {
    /// Returns true if the number is a normal number and not something like Infinity or NaN.
    fn is_normal_number(self) -> bool;

    /// Returns true if the number is finite and strictly greater than zero.
    fn is_positive_normal_number(self) -> bool;
}

macro_rules! impl_is_normal_number {
    (for unsigned: $($t:ident),*) => {
        $(
            impl IsNormalNumber for $t {
                #[inline(always)]
                fn is_normal_number(self) -> bool {
                    true
                }

                #[inline(always)]
                fn is_positive_normal_number(self) -> bool {
                    self > 0
                }
            }
        )*
    };
    (for float: $($t:ident),*) => {
        $(
            impl IsNormalNumber for $t {
                #[inline(always)]
                fn is_normal_number(self) -> bool {
                    self.is_normal()
                }

                #[inline(always)]
                fn is_positive_normal_number(self) -> bool {
                    self.is_finite() && self > 0.0
                }
            }
        )*
    };
}

impl_is_normal_number!(for unsigned: u8, u16, u32, u64, u128, usize);
impl_is_normal_number!(for float: f32, f64);

#[cfg(test)]
mod test {
    use super::IsNormalNumber;

    #[test]
    fn rejects_non_finite_and_non_positive_floats() {
        assert!(0.1f64.is_positive_normal_number());
        assert!(!0.0f64.is_positive_normal_number());
        assert!(!(-0.5f64).is_positive_normal_number());
        assert!(!f64::NAN.is_positive_normal_number());
        assert!(!f64::INFINITY.is_positive_normal_number());
        assert!(1e-310f64.is_positive_normal_number());
        assert!(3usize.is_positive_normal_number());
        assert!(!0usize.is_positive_normal_number());
    }
}
