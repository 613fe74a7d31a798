pub mod ef_cardaccess;
pub mod ef_com;
pub mod ef_dg1;
pub mod ef_dg11;
pub mod ef_dg12;
pub mod ef_dg2;
pub mod ef_dg5;
pub mod ef_sod;
pub mod generic;
pub mod helpers;
