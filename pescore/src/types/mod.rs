//! Small fixed-size linear algebra types used for positions, gradients, cells
//! and virials.

/// Implement the binary operator `$Op` between `$Lhs` and `$Rhs` from the
/// by-value expression `$body`, and forward the implementations for
/// references and mutable references on both sides to it. Both types must be
/// `Copy`.
macro_rules! binary_operator {
    ($Op:ident :: $op:ident ($Lhs:ty, $Rhs:ty) -> $Output:ty, |$lhs:ident, $rhs:ident| $body:expr) => {
        impl $Op<$Rhs> for $Lhs {
            type Output = $Output;
            #[inline]
            fn $op(self, other: $Rhs) -> $Output {
                let $lhs = self;
                let $rhs = other;
                $body
            }
        }

        binary_operator!(@forward $Op::$op($Lhs, $Rhs) -> $Output);
    };
    (@forward $Op:ident :: $op:ident ($Lhs:ty, $Rhs:ty) -> $Output:ty) => {
        impl<'a> $Op<&'a $Rhs> for $Lhs {
            type Output = $Output;
            #[inline] fn $op(self, other: &'a $Rhs) -> $Output { $Op::$op(self, *other) }
        }

        impl<'a> $Op<&'a mut $Rhs> for $Lhs {
            type Output = $Output;
            #[inline] fn $op(self, other: &'a mut $Rhs) -> $Output { $Op::$op(self, *other) }
        }

        impl<'a> $Op<$Rhs> for &'a $Lhs {
            type Output = $Output;
            #[inline] fn $op(self, other: $Rhs) -> $Output { $Op::$op(*self, other) }
        }

        impl<'a> $Op<$Rhs> for &'a mut $Lhs {
            type Output = $Output;
            #[inline] fn $op(self, other: $Rhs) -> $Output { $Op::$op(*self, other) }
        }

        impl<'a, 'b> $Op<&'a $Rhs> for &'b $Lhs {
            type Output = $Output;
            #[inline] fn $op(self, other: &'a $Rhs) -> $Output { $Op::$op(*self, *other) }
        }

        impl<'a, 'b> $Op<&'a mut $Rhs> for &'b $Lhs {
            type Output = $Output;
            #[inline] fn $op(self, other: &'a mut $Rhs) -> $Output { $Op::$op(*self, *other) }
        }

        impl<'a, 'b> $Op<&'a $Rhs> for &'b mut $Lhs {
            type Output = $Output;
            #[inline] fn $op(self, other: &'a $Rhs) -> $Output { $Op::$op(*self, *other) }
        }

        impl<'a, 'b> $Op<&'a mut $Rhs> for &'b mut $Lhs {
            type Output = $Output;
            #[inline] fn $op(self, other: &'a mut $Rhs) -> $Output { $Op::$op(*self, *other) }
        }
    };
}

/// Implement the compound assignment operator `$Op` (`+=`, `-=`, ...) with
/// `$body`, for `$Rhs` taken by value or by reference.
macro_rules! assign_operator {
    ($Op:ident :: $op:ident ($Lhs:ty, $Rhs:ty), |$lhs:ident, $rhs:ident| $body:block) => {
        impl $Op<$Rhs> for $Lhs {
            #[inline]
            fn $op(&mut self, other: $Rhs) {
                let $lhs = self;
                let $rhs = other;
                $body
            }
        }

        impl<'a> $Op<&'a $Rhs> for $Lhs {
            #[inline] fn $op(&mut self, other: &'a $Rhs) { $Op::$op(self, *other) }
        }

        impl<'a> $Op<&'a mut $Rhs> for $Lhs {
            #[inline] fn $op(&mut self, other: &'a mut $Rhs) { $Op::$op(self, *other) }
        }
    };
}

mod vectors;
pub use self::vectors::Vector3D;

mod matrix;
pub use self::matrix::Matrix3;
