pub mod lookup_nutrition;
